use axum_crud_ui::{Backend, DatabaseSettings};
use sqlx::sqlite::SqlitePool;

/// Create the demo schema and fill it once
pub async fn seed(settings: &DatabaseSettings) -> anyhow::Result<()> {
    if settings.backend != Backend::Sqlite {
        anyhow::bail!(
            "--seed-demo only supports sqlite, the configured backend is {}",
            settings.backend.as_str()
        );
    }

    let pool = SqlitePool::connect(&settings.connection_url()).await?;
    setup(&pool).await?;
    pool.close().await;
    Ok(())
}

async fn setup(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            bio TEXT,
            birthday DATE,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            is_active BOOLEAN DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            price REAL NOT NULL,
            stock INTEGER DEFAULT 0,
            category TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER REFERENCES users(id),
            product_id INTEGER REFERENCES products(id),
            quantity INTEGER NOT NULL,
            total REAL NOT NULL,
            status TEXT DEFAULT 'pending',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            message TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    seed_sample_data(pool).await
}

async fn seed_sample_data(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let user_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    if user_count.0 > 0 {
        tracing::info!("demo data already present");
        return Ok(());
    }

    let first_names = [
        "Alice", "Bob", "Charlie", "Diana", "Evan", "Fiona", "George", "Hannah", "Isaac",
        "Julia", "Kevin", "Laura", "Michael", "Nancy", "Oscar", "Patricia",
    ];
    let last_names = [
        "Johnson", "Smith", "Brown", "Prince", "Davis", "Wilson", "Taylor", "Anderson",
        "Thomas", "Jackson", "White", "Harris", "Martin",
    ];

    for index in 0..120 {
        let first = first_names[index % first_names.len()];
        let last = last_names[index % last_names.len()];
        let email = format!(
            "{}.{}{}@example.com",
            first.to_lowercase(),
            last.to_lowercase(),
            index
        );
        let birthday = format!(
            "19{:02}-{:02}-{:02}",
            60 + index % 40,
            1 + index % 12,
            1 + index % 28
        );
        let is_active = index % 5 != 0;
        sqlx::query(
            "INSERT INTO users (name, email, bio, birthday, is_active) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(format!("{} {}", first, last))
        .bind(email)
        .bind(format!("{} has been a customer since {}.", first, 2010 + index % 14))
        .bind(birthday)
        .bind(is_active)
        .execute(pool)
        .await?;
    }

    let categories = ["Electronics", "Furniture", "Stationery", "Clothing", "Sports", "Books"];
    let product_types = [
        "Laptop", "Mouse", "Keyboard", "Monitor", "Chair", "Desk", "Notebook", "Pen",
        "Headphones", "Webcam", "Lamp", "Shelf",
    ];

    for index in 0..60 {
        let product_type = product_types[index % product_types.len()];
        let category = categories[index % categories.len()];
        let price = 5.99 + (index as f64 * 12.5) + ((index % 7) as f64 * 3.33);
        let stock = (index * 7 + 5) % 500;

        sqlx::query("INSERT INTO products (name, price, stock, category) VALUES (?, ?, ?, ?)")
            .bind(format!("{} {}", product_type, index + 1))
            .bind(price)
            .bind(stock as i32)
            .bind(category)
            .execute(pool)
            .await?;
    }

    let statuses = ["pending", "processing", "shipped", "completed", "cancelled"];

    for index in 0..400 {
        let user_id = (index % 120) + 1;
        let product_id = (index % 60) + 1;
        let quantity = (index % 10) + 1;
        let total = (quantity as f64) * (5.99 + (product_id as f64) * 12.5);

        sqlx::query(
            "INSERT INTO orders (user_id, product_id, quantity, total, status) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id as i32)
        .bind(product_id as i32)
        .bind(quantity as i32)
        .bind(total)
        .bind(statuses[index % statuses.len()])
        .execute(pool)
        .await?;
    }

    sqlx::query("INSERT INTO audit_log (message) VALUES ('demo data seeded')")
        .execute(pool)
        .await?;

    tracing::info!(users = 120, products = 60, orders = 400, "demo data seeded");
    Ok(())
}
