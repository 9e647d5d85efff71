pub mod email;
pub mod imagekit;
pub mod jwt;
pub mod msg91;
pub mod razorpay;

pub use email::EmailService;
pub use imagekit::ImageKitService;
pub use jwt::JwtService;
pub use razorpay::RazorpayService;
