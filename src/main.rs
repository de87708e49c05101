#[actix_web::main]
async fn main() -> std::io::Result<()> {
    emailcheck_lib::run().await
}
