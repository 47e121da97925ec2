// black-box tests: one binary, one module per endpoint
mod health_check;
mod helpers;
mod subscriptions;
