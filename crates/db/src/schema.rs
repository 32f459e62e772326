use eyre::Result;
use sqlx::{Executor, Pool, Postgres};
use tracing::info;

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Create users table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            email VARCHAR(255) NOT NULL UNIQUE,
            name VARCHAR(255) NOT NULL,
            phone VARCHAR(64) NULL,
            password_hash VARCHAR(255) NULL,
            is_admin BOOLEAN NOT NULL DEFAULT FALSE,
            onboarding_completed BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create packages table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS packages (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(255) NOT NULL,
            description TEXT NULL,
            price_cents INTEGER NOT NULL CHECK (price_cents >= 0),
            sessions INTEGER NOT NULL CHECK (sessions > 0),
            duration_days INTEGER NOT NULL CHECK (duration_days > 0),
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create purchases table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS purchases (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            user_id UUID NOT NULL REFERENCES users(id),
            package_id UUID NOT NULL REFERENCES packages(id),
            amount_cents INTEGER NOT NULL,
            payment_reference VARCHAR(255) NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create user_packages table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_packages (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            user_id UUID NOT NULL REFERENCES users(id),
            package_id UUID NOT NULL REFERENCES packages(id),
            purchase_id UUID NULL REFERENCES purchases(id),
            sessions_remaining INTEGER NOT NULL CHECK (sessions_remaining >= 0),
            purchase_date TIMESTAMP WITH TIME ZONE NOT NULL,
            expiry_date TIMESTAMP WITH TIME ZONE NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create recurring_class_templates table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recurring_class_templates (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(255) NOT NULL,
            description TEXT NULL,
            instructor VARCHAR(255) NULL,
            class_type VARCHAR(64) NOT NULL,
            days_of_week INTEGER[] NOT NULL,
            start_time TIME NOT NULL,
            end_time TIME NOT NULL,
            start_date DATE NOT NULL,
            end_date DATE NULL,
            max_participants INTEGER NOT NULL CHECK (max_participants > 0),
            price_cents INTEGER NOT NULL DEFAULT 0,
            credits_required INTEGER NOT NULL DEFAULT 1,
            waitlist_enabled BOOLEAN NOT NULL DEFAULT TRUE,
            waitlist_capacity INTEGER NOT NULL DEFAULT 0,
            cancellation_deadline_hours INTEGER NOT NULL DEFAULT 24,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_template_times CHECK (end_time > start_time)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create classes table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS classes (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            template_id UUID NULL REFERENCES recurring_class_templates(id),
            name VARCHAR(255) NOT NULL,
            description TEXT NULL,
            instructor VARCHAR(255) NULL,
            class_type VARCHAR(64) NOT NULL,
            class_date DATE NOT NULL,
            start_time TIME NOT NULL,
            end_time TIME NOT NULL,
            max_participants INTEGER NOT NULL CHECK (max_participants > 0),
            current_participants INTEGER NOT NULL DEFAULT 0,
            price_cents INTEGER NOT NULL DEFAULT 0,
            credits_required INTEGER NOT NULL DEFAULT 1,
            waitlist_enabled BOOLEAN NOT NULL DEFAULT TRUE,
            waitlist_capacity INTEGER NOT NULL DEFAULT 0,
            cancellation_deadline_hours INTEGER NOT NULL DEFAULT 24,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_class_times CHECK (end_time > start_time),
            CONSTRAINT participants_within_capacity
                CHECK (current_participants >= 0 AND current_participants <= max_participants),
            CONSTRAINT one_class_per_template_date UNIQUE (template_id, class_date)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create bookings table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookings (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            sequence BIGINT GENERATED ALWAYS AS IDENTITY,
            user_id UUID NOT NULL REFERENCES users(id),
            class_id UUID NOT NULL REFERENCES classes(id),
            status VARCHAR(16) NOT NULL,
            user_package_id UUID NULL REFERENCES user_packages(id),
            credits_used INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            cancelled_at TIMESTAMP WITH TIME ZONE NULL,
            promoted_at TIMESTAMP WITH TIME ZONE NULL,
            CONSTRAINT valid_booking_status CHECK (status IN ('confirmed', 'waitlist', 'cancelled'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Columns added after the initial schema; multi-statement batches go
    // through the simple query protocol
    pool.execute(
        r#"
        ALTER TABLE users ADD COLUMN IF NOT EXISTS waiver_signature TEXT NULL;
        ALTER TABLE users ADD COLUMN IF NOT EXISTS waiver_signed_date TIMESTAMP WITH TIME ZONE NULL;
        ALTER TABLE users ADD COLUMN IF NOT EXISTS waiver_pdf_data BYTEA NULL;
        ALTER TABLE users ADD COLUMN IF NOT EXISTS weightlifting_classes_booked INTEGER NOT NULL DEFAULT 0;
        ALTER TABLE recurring_class_templates ADD COLUMN IF NOT EXISTS daily_schedule JSONB NULL;
        ALTER TABLE bookings ADD COLUMN IF NOT EXISTS google_calendar_event_id VARCHAR(255) NULL;
        "#,
    )
    .await?;

    // Create indexes
    pool.execute(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_bookings_one_active_per_user_class
            ON bookings(user_id, class_id) WHERE status <> 'cancelled';
        CREATE INDEX IF NOT EXISTS idx_bookings_class_status ON bookings(class_id, status);
        CREATE INDEX IF NOT EXISTS idx_bookings_user_id ON bookings(user_id);
        CREATE INDEX IF NOT EXISTS idx_classes_class_date ON classes(class_date);
        CREATE INDEX IF NOT EXISTS idx_classes_template_id ON classes(template_id);
        CREATE INDEX IF NOT EXISTS idx_user_packages_user_id ON user_packages(user_id);
        CREATE INDEX IF NOT EXISTS idx_purchases_user_id ON purchases(user_id);
        "#,
    )
    .await?;

    info!("Database schema initialized successfully.");
    Ok(())
}
