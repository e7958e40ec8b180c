/// Domain rules around login and reservation readiness
pub mod login_state;
pub mod readiness;

pub use login_state::LoginState;
pub use readiness::Readiness;
