//! `cargo run -p migration -- up` applies the newsletter schema;
//! `status`, `down` and `fresh` work as in any sea-orm-migration CLI.

use migration::Migrator;

#[tokio::main]
async fn main() {
    sea_orm_migration::cli::run_cli(Migrator).await;
}
