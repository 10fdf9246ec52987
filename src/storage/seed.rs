use rust_decimal::Decimal;

use super::memory::MemoryStore;
use super::store::{CatalogStore, StorageError};
use crate::domain::catalog::{NewCategory, NewMenuItem};
use crate::domain::identity::Identity;

struct SeedCategory {
    name: &'static str,
    emoji: &'static str,
    slug: &'static str,
    items: &'static [(&'static str, &'static str, i64, bool)],
}

// (name, description, price in cents, popular)
const DEMO_MENU: &[SeedCategory] = &[
    SeedCategory {
        name: "Burgers",
        emoji: "🍔",
        slug: "burgers",
        items: &[
            ("Durger King Classic", "Flame-grilled beef patty with lettuce, tomato and our signature sauce", 899, true),
            ("Cheese Royale", "Double cheese, pickles and onions on a toasted brioche bun", 999, false),
            ("Chicken Supreme", "Crispy chicken fillet with mayo and fresh lettuce", 799, false),
        ],
    },
    SeedCategory {
        name: "Shashlik",
        emoji: "🍢",
        slug: "shashlik",
        items: &[
            ("Beef Shashlik", "Marinated beef skewers grilled over open flame", 1299, true),
            ("Lamb Shashlik", "Tender lamb skewers with onions and herbs", 1499, false),
            ("Chicken Shashlik", "Juicy chicken thigh skewers with spices", 1099, false),
        ],
    },
    SeedCategory {
        name: "Plov",
        emoji: "🍚",
        slug: "plov",
        items: &[
            ("Uzbek Plov", "Traditional rice pilaf with lamb, carrots and chickpeas", 1399, true),
            ("Chicken Plov", "Rice pilaf with chicken, carrots and raisins", 1199, false),
            ("Vegetarian Plov", "Rice pilaf with seasonal vegetables and chickpeas", 999, false),
        ],
    },
    SeedCategory {
        name: "Drinks",
        emoji: "🥤",
        slug: "drinks",
        items: &[
            ("Coca-Cola", "Chilled 0.5L bottle", 249, false),
            ("Orange Juice", "Freshly squeezed orange juice", 349, false),
            ("Milkshake Vanilla", "Thick vanilla milkshake with whipped cream", 499, true),
        ],
    },
    SeedCategory {
        name: "Combos",
        emoji: "🍱",
        slug: "combos",
        items: &[
            ("Big Durger Combo", "Durger King Classic with fries and a drink", 1299, true),
            ("Chicken Deluxe Combo", "Chicken Supreme with onion rings and a milkshake", 1499, false),
        ],
    },
    SeedCategory {
        name: "Sides",
        emoji: "🍟",
        slug: "sides",
        items: &[
            ("French Fries", "Golden crispy fries with sea salt", 399, false),
            ("Onion Rings", "Beer-battered onion rings", 449, false),
        ],
    },
];

/// Fill an empty store with the demo menu.
pub async fn seed_demo_catalog(store: &MemoryStore) -> Result<(), StorageError> {
    let mut item_count = 0usize;

    for (position, seed) in DEMO_MENU.iter().enumerate() {
        let category = store
            .create_category(NewCategory {
                name: seed.name.to_string(),
                emoji: Some(seed.emoji.to_string()),
                slug: seed.slug.to_string(),
                description: None,
                sort_order: position as i32,
            })
            .await?;

        for (sort_order, (name, description, cents, popular)) in seed.items.iter().enumerate() {
            store
                .create_menu_item(NewMenuItem {
                    name: name.to_string(),
                    description: Some(description.to_string()),
                    price: Decimal::new(*cents, 2),
                    category_id: Some(category.id),
                    image_url: None,
                    is_popular: *popular,
                    preparation_minutes: Some(10),
                    sort_order: sort_order as i32,
                })
                .await?;
            item_count += 1;
        }
    }

    tracing::info!(categories = DEMO_MENU.len(), menu_items = item_count, "Seeded demo catalog");
    Ok(())
}

/// Register `admin_id` as an admin account. Only ever called for an id the
/// operator configured.
pub async fn seed_admin(store: &MemoryStore, admin_id: &str) {
    store.upsert_identity(Identity::new(admin_id).admin()).await;
    tracing::warn!(admin = admin_id, "Seeded admin account from configuration");
}
