use tracing::info;

use crate::database::Database;

pub async fn seed_initial_data(db: &Database) -> Result<(), sqlx::Error> {
    seed_categories(db).await?;
    seed_venues(db).await?;
    Ok(())
}

async fn seed_categories(db: &Database) -> Result<(), sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(&db.pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    let categories: &[(&str, &str, &str, &str)] = &[
        ("Conference", "Professional conferences and seminars", "🎯", "#3B82F6"),
        ("Workshop", "Hands-on learning workshops", "🔨", "#8B5CF6"),
        ("Networking", "Professional networking events", "🤝", "#10B981"),
        ("Social", "Social gatherings and parties", "🎉", "#F59E0B"),
        ("Sports", "Sports events and competitions", "⚽", "#EF4444"),
        ("Music", "Concerts and music events", "🎵", "#EC4899"),
        ("Art & Culture", "Art exhibitions and cultural events", "🎨", "#6366F1"),
        ("Technology", "Tech meetups and hackathons", "💻", "#059669"),
        ("Education", "Educational seminars and courses", "📚", "#7C3AED"),
        ("Food & Drink", "Culinary events and tastings", "🍽️", "#DC2626"),
    ];

    for (name, description, icon, color) in categories {
        sqlx::query(
            "INSERT INTO categories (name, description, icon_url, color) VALUES ($1, $2, $3, $4)",
        )
        .bind(name)
        .bind(description)
        .bind(icon)
        .bind(color)
        .execute(&db.pool)
        .await?;
    }

    info!("Seeded {} categories", categories.len());
    Ok(())
}

async fn seed_venues(db: &Database) -> Result<(), sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM venues")
        .fetch_one(&db.pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    struct SeedVenue {
        name: &'static str,
        address: &'static str,
        city: &'static str,
        state: &'static str,
        zip_code: &'static str,
        country: &'static str,
        capacity: i32,
        description: &'static str,
        amenities: &'static str,
        latitude: f64,
        longitude: f64,
    }

    let venues = [
        SeedVenue {
            name: "Grand Convention Center",
            address: "123 Convention Ave",
            city: "New York",
            state: "NY",
            zip_code: "10001",
            country: "USA",
            capacity: 1000,
            description: "Modern convention center with state-of-the-art facilities",
            amenities: "Wi-Fi, Parking, Catering, Audio/Visual Equipment",
            latitude: 40.7589,
            longitude: -73.9851,
        },
        SeedVenue {
            name: "Tech Hub Auditorium",
            address: "456 Innovation Drive",
            city: "San Francisco",
            state: "CA",
            zip_code: "94105",
            country: "USA",
            capacity: 500,
            description: "Modern auditorium perfect for tech events",
            amenities: "Wi-Fi, Recording Equipment, Live Streaming",
            latitude: 37.7749,
            longitude: -122.4194,
        },
        SeedVenue {
            name: "Riverside Event Hall",
            address: "789 Riverside Blvd",
            city: "Austin",
            state: "TX",
            zip_code: "78701",
            country: "USA",
            capacity: 300,
            description: "Scenic venue by the river for social gatherings",
            amenities: "Wi-Fi, Outdoor Terrace, Bar Service",
            latitude: 30.2672,
            longitude: -97.7431,
        },
    ];

    for v in &venues {
        sqlx::query(
            "INSERT INTO venues
                 (name, address, city, state, zip_code, country, capacity,
                  description, amenities, latitude, longitude)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(v.name)
        .bind(v.address)
        .bind(v.city)
        .bind(v.state)
        .bind(v.zip_code)
        .bind(v.country)
        .bind(v.capacity)
        .bind(v.description)
        .bind(v.amenities)
        .bind(v.latitude)
        .bind(v.longitude)
        .execute(&db.pool)
        .await?;
    }

    info!("Seeded {} venues", venues.len());
    Ok(())
}
