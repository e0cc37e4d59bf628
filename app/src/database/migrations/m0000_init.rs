use super::{Migration, SimpleSqlMigration};

pub fn migration() -> impl Migration {
    SimpleSqlMigration {
        serial_number: 0,
        sql: vec![
            r#"
            CREATE TABLE users (
                id BIGSERIAL PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password TEXT NOT NULL,
                about TEXT NOT NULL,
                avatar TEXT NOT NULL,
                created TIMESTAMP WITH TIME ZONE NOT NULL,
                updated TIMESTAMP WITH TIME ZONE NOT NULL
            )"#,
            r#"
            CREATE TABLE auth_tokens (
                id UUID PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users,
                token_hash TEXT UNIQUE NOT NULL,
                created TIMESTAMP WITH TIME ZONE NOT NULL,
                disabled TIMESTAMP WITH TIME ZONE
            )"#,
            // Prices and amounts are stored in cents, NUMERIC(10, 2) in spirit
            r#"
            CREATE TABLE wishes (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                link TEXT NOT NULL,
                image TEXT NOT NULL,
                price_cents BIGINT NOT NULL CHECK (price_cents >= 0),
                description TEXT NOT NULL,
                owner_id BIGINT NOT NULL REFERENCES users,
                created TIMESTAMP WITH TIME ZONE NOT NULL
            )"#,
            r#"CREATE INDEX wish_owner ON wishes (owner_id)"#,
            r#"
            CREATE TABLE offers (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users,
                item_id BIGINT NOT NULL REFERENCES wishes,
                amount_cents BIGINT NOT NULL CHECK (amount_cents >= 0),
                hidden BOOLEAN NOT NULL DEFAULT FALSE,
                created TIMESTAMP WITH TIME ZONE NOT NULL
            )"#,
            r#"CREATE INDEX offer_item ON offers (item_id)"#,
            r#"CREATE INDEX offer_user ON offers (user_id)"#,
        ],
    }
}
