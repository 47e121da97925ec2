mod new_subscriber;
mod subscriber;
mod subscriber_email;
mod subscription_token;
// allow external `use` statements to skip `new_subscriber` etc
pub use new_subscriber::NewSubscriber;
pub use subscriber::Subscriber;
pub use subscriber_email::SubscriberEmail;
pub use subscription_token::SubscriptionToken;
pub use subscription_token::TOKEN_LENGTH;
