pub mod error;
pub mod state;
pub mod supabase;

pub use error::DbError;
pub use state::AppState;
pub use supabase::{filter_value, SupabaseClient};
