//! Demo catalog loaded into empty stores.
//!
//! Kept in step with `migrations/002_seed_products.sql`.

use crate::NewProduct;

/// Units on hand for every demo product.
pub const DEMO_STOCK: i64 = 20;

/// Returns the demo catalog in insertion order.
pub fn demo_catalog() -> Vec<NewProduct> {
    vec![
        NewProduct::new("Nike Sneaker", 500_000, "Premium", DEMO_STOCK),
        NewProduct::new("Puma Hoodie", 300_000, "Premium", DEMO_STOCK),
        NewProduct::new("G-Shock Watch", 800_000, "Premium", DEMO_STOCK),
        NewProduct::new("X-Box 360", 2_500_000, "Premium", DEMO_STOCK),
        NewProduct::new("Samsung Smart Watch", 1_000_000, "Premium", DEMO_STOCK),
        NewProduct::new("H&M Sweat Shirt", 150_000, "Regular", DEMO_STOCK),
        NewProduct::new("RedTape Sneakers", 180_000, "Regular", DEMO_STOCK),
        NewProduct::new("Jeans", 200_000, "Regular", DEMO_STOCK),
        NewProduct::new("Shirt", 80_000, "Budget", DEMO_STOCK),
        NewProduct::new("Cargo Pants", 100_000, "Budget", DEMO_STOCK),
    ]
}
