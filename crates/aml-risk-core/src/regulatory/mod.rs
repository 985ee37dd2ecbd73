pub mod legal_basis;
pub mod profile;
