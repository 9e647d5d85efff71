#[macro_use]
extern crate rocket;

mod config;
mod db;
mod guards;
mod media;
mod models;
mod routes;
mod services;
mod utils;
mod wizard;

use dotenvy::dotenv;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Build, Request, Response, Rocket};
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};

/* ----------------------------- CORS ----------------------------- */

pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        if let Some(origin) = request.headers().get_one("Origin") {
            response.set_header(Header::new("Access-Control-Allow-Origin", origin));
        }

        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        ));

        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        ));

        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

/* ----------------------------- OPTIONS ----------------------------- */

#[options("/<_..>")]
fn options_handler() {}

/* ----------------------------- ERRORS ----------------------------- */

#[catch(404)]
fn not_found() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Resource not found (check /api/v1 prefix)"
    })
}

#[catch(500)]
fn internal_error() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Internal server error"
    })
}

/* ----------------------------- SWAGGER ----------------------------- */

fn swagger_config() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/openapi.json".to_string(),
        ..Default::default()
    }
}

/* ----------------------------- LAUNCH ----------------------------- */

#[launch]
fn rocket() -> Rocket<Build> {
    dotenv().ok();
    env_logger::init();

    println!("🏠 UrbanNest API running");
    println!("📚 Swagger UI → http://localhost:8000/api/docs");

    rocket::build()
        .attach(db::init())
        .attach(CORS)
        .mount("/", routes![options_handler])
        .mount(
            "/api/v1",
            routes![
                // Auth
                routes::auth::send_otp,
                routes::auth::resend_otp,
                routes::auth::verify_otp,
                routes::auth::refresh_token,
                // Account
                routes::account::get_profile,
                routes::account::update_profile,
                routes::account::get_credits,
                routes::account::delete_account,
                // Draft wizard
                routes::draft::validate_draft_stage,
                // Listings
                routes::listing::create_listing,
                routes::listing::get_listing,
                routes::listing::get_my_listings,
                routes::listing::update_listing,
                routes::listing::delete_listing,
                routes::listing::search_listings,
                routes::listing::similar_listings,
                // Media
                routes::media::upload_auth,
                // Payments
                routes::payment::create_credit_order,
                routes::payment::create_verification_order,
                routes::payment::verify_payment,
                // Admin - Listings
                routes::admin::get_all_listings,
                routes::admin::update_listing_status,
                routes::admin::revise_listing_price,
                routes::admin::set_listing_featured,
                // Admin - Users
                routes::admin::get_all_users,
                routes::admin::grant_credits,
            ],
        )
        .mount("/api/docs", make_swagger_ui(&swagger_config()))
        .register("/", catchers![not_found, internal_error])
}
