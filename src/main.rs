#[actix_web::main]
async fn main() -> std::io::Result<()> {
    internship_certificate_server::run().await
}
