pub mod error;
pub mod models;
pub mod money;
pub mod pii;

pub use error::ErrorKind;
pub use models::ReservationEvent;
pub use money::{Money, MoneyError};
pub use pii::{Masked, MaskedPhone};
