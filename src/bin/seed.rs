use settlement::{
    domain::{
        format_cents, CreateStoreRequest, Order, OrderItem, OrderStatus, PaymentMethod,
        PaymentStatus, PayoutMethod, UpsertBankDetail,
    },
    repository::{
        BankDetailRepository, OrderRepository, SqliteBankDetailRepository, SqliteOrderRepository,
        SqliteStoreRepository, StoreRepository,
    },
};
use chrono::{Duration, Utc};
use clap::Parser;
use fake::{
    faker::{
        address::en::{CityName, StreetName},
        internet::en::SafeEmail,
        lorem::en::Word,
        name::en::Name,
        phone_number::en::PhoneNumber,
    },
    Fake,
};
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

/// Seed a demo store with delivered orders old enough to be paid out.
#[derive(Parser, Debug)]
#[command(name = "seed")]
struct Args {
    /// Database to seed
    #[arg(long, default_value = "sqlite://settlement.db?mode=rwc")]
    database_url: String,

    /// Number of delivered orders to create
    #[arg(long, default_value_t = 5)]
    orders: usize,

    /// How many days ago the orders were delivered
    #[arg(long, default_value_t = 8)]
    delivered_days_ago: i64,

    /// Leave out bank details so payouts are blocked
    #[arg(long)]
    without_bank_details: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    println!("🌱 Seeding {}...", args.database_url);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await?;

    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    let store_repo = SqliteStoreRepository::new(db_pool.clone());
    let order_repo = SqliteOrderRepository::new(db_pool.clone());
    let bank_detail_repo = SqliteBankDetailRepository::new(db_pool.clone());

    let seller_id = Uuid::new_v4();
    let store = store_repo.create(CreateStoreRequest {
        seller_id,
        name: format!("{} Crafts", CityName().fake::<String>()),
        owner_email: Some(SafeEmail().fake()),
    }).await?;
    println!("  ✅ Created store {} ({})", store.name, store.id);

    if args.without_bank_details {
        println!("  ⚠️  Skipping bank details; payouts for this seller will be blocked");
    } else {
        bank_detail_repo.upsert(UpsertBankDetail {
            seller_id,
            account_holder_name: Name().fake(),
            bank_name: "HDFC".to_string(),
            account_number: format!("{:012}", (100_000_000_000u64..999_999_999_999u64).fake::<u64>()),
            routing_code: "HDFC0001234".to_string(),
            alias_id: None,
            payout_method: PayoutMethod::BankTransfer,
        }).await?;
        println!("  ✅ Added bank details for seller {}", seller_id);
    }

    let delivered_at = Utc::now() - Duration::days(args.delivered_days_ago);
    let mut grand_total = 0i64;

    for _ in 0..args.orders {
        let order_id = Uuid::new_v4();
        let quantity: i64 = (1..4).fake();
        let unit_price: i64 = (19_900..249_900).fake();
        let total = quantity * unit_price;
        let cod = (0..2).fake::<u8>() == 0;

        let order = Order {
            id: order_id,
            store_id: store.id,
            buyer_name: Name().fake(),
            buyer_email: Some(SafeEmail().fake()),
            buyer_phone: Some(PhoneNumber().fake()),
            buyer_address: Some(format!("{}, {}", StreetName().fake::<String>(), CityName().fake::<String>())),
            total_price_cents: total,
            payment_method: if cod { PaymentMethod::Cod } else { PaymentMethod::Online },
            payment_status: PaymentStatus::Paid,
            status: OrderStatus::Delivered,
            gateway_order_id: (!cod).then(|| format!("order_{}", order_id.simple())),
            gateway_payment_id: (!cod).then(|| format!("pay_{}", order_id.simple())),
            gateway_signature: None,
            notes: Some("Seeded order".to_string()),
            paid_at: Some(delivered_at),
            delivered_at: Some(delivered_at),
            created_at: delivered_at - Duration::days(3),
            updated_at: delivered_at,
            items: vec![],
        };
        order_repo.insert_order(&order).await?;

        let word: String = Word().fake();
        order_repo.insert_items(order_id, &[OrderItem {
            id: Uuid::new_v4(),
            order_id,
            product_id: Uuid::new_v4(),
            product_name: format!("Handmade {}", word),
            product_image: None,
            quantity,
            price_at_purchase_cents: unit_price,
        }]).await?;

        grand_total += total;
    }

    println!(
        "  ✅ Created {} delivered orders totalling {}",
        args.orders,
        format_cents(grand_total)
    );
    println!("🎉 Done. Trigger POST /admin/payouts/generate to batch them.");

    Ok(())
}
