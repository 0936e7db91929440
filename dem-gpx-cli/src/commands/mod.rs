pub mod correct;
pub mod inspect;
