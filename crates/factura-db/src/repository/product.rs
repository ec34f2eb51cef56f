//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Key Operations
//! - CRUD for the product screens
//! - Atomic stock reservation for sale registration
//!
//! ## Stock Reservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Read-check-write loses updates when two sales race:                   │
//! │                                                                         │
//! │    sale A reads stock=1 ─┐                                             │
//! │    sale B reads stock=1 ─┼─► both write stock=0, two units sold        │
//! │                                                                         │
//! │  try_reserve_stock folds the check into the write:                     │
//! │                                                                         │
//! │    UPDATE products SET stock = stock - ?q                              │
//! │     WHERE id = ?id AND stock >= ?q                                     │
//! │                                                                         │
//! │    rows_affected = 1 → reserved                                        │
//! │    rows_affected = 0 → not enough stock (or product gone)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use factura_core::{NewProduct, Product};

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists every product ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price_cents, stock, created_at, updated_at
            FROM products
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Adds a product to the catalog.
    pub async fn insert(&self, product: &NewProduct) -> DbResult<Product> {
        let now = Utc::now();
        let name = product.name.trim();

        debug!(name = %name, price_cents = product.price_cents, "Inserting product");

        let result = sqlx::query(
            r#"
            INSERT INTO products (name, price_cents, stock, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
        )
        .bind(name)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Product {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            price_cents: product.price_cents,
            stock: product.stock,
            created_at: now,
            updated_at: now,
        })
    }

    /// Overwrites name, price and stock of an existing product.
    ///
    /// Past sale lines keep the name and price they were sold at.
    pub async fn update(&self, id: i64, product: &NewProduct) -> DbResult<Product> {
        let now = Utc::now();

        debug!(id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                price_cents = ?3,
                stock = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(product.name.trim())
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Removes a product from the catalog.
    ///
    /// Sale lines that referenced it keep their snapshot and lose the link
    /// (`ON DELETE SET NULL`), so old invoices still render.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts catalog products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level helpers (usable inside a transaction)
// =============================================================================

/// Fetches a product on an existing connection.
pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, price_cents, stock, created_at, updated_at
        FROM products
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

/// Decrements stock by `quantity` only if at least that much is on hand.
///
/// ## Returns
/// * `Ok(true)` - Stock reserved
/// * `Ok(false)` - Not enough stock, nothing changed
pub async fn try_reserve_stock(
    conn: &mut SqliteConnection,
    product_id: i64,
    quantity: i64,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products SET
            stock = stock - ?2,
            updated_at = ?3
        WHERE id = ?1 AND stock >= ?2
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn new_product(name: &str, price_cents: i64, stock: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            price_cents,
            stock,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let created = repo.insert(&new_product("  Yerba 1kg ", 1899, 12)).await.unwrap();
        assert_eq!(created.name, "Yerba 1kg");

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.price_cents, 1899);
        assert_eq!(fetched.stock, 12);

        assert!(repo.get_by_id(created.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&new_product("Queso", 900, 1)).await.unwrap();
        repo.insert(&new_product("Arroz", 300, 1)).await.unwrap();
        repo.insert(&new_product("Leche", 250, 1)).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Arroz", "Leche", "Queso"]);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let p = repo.insert(&new_product("Pan", 200, 5)).await.unwrap();
        let updated = repo.update(p.id, &new_product("Pan lactal", 350, 8)).await.unwrap();
        assert_eq!(updated.name, "Pan lactal");
        assert_eq!(updated.price_cents, 350);
        assert_eq!(updated.stock, 8);

        repo.delete(p.id).await.unwrap();
        assert!(repo.get_by_id(p.id).await.unwrap().is_none());

        assert!(repo.delete(p.id).await.unwrap_err().is_not_found());
        assert!(repo
            .update(p.id, &new_product("x", 1, 1))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_negative_stock_rejected_by_schema() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .products()
            .insert(&new_product("Broken", 100, -1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_try_reserve_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let p = db.products().insert(&new_product("Aceite", 1200, 3)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(try_reserve_stock(&mut conn, p.id, 2).await.unwrap());
        assert!(!try_reserve_stock(&mut conn, p.id, 2).await.unwrap());
        assert!(try_reserve_stock(&mut conn, p.id, 1).await.unwrap());
        assert!(!try_reserve_stock(&mut conn, p.id + 1, 1).await.unwrap());
        drop(conn);

        let p = db.products().get_by_id(p.id).await.unwrap().unwrap();
        assert_eq!(p.stock, 0);
    }
}
