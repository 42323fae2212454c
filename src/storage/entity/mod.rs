pub mod field_boundary;
pub mod form_response;

pub use field_boundary::Entity as FieldBoundary;
pub use form_response::Entity as FormResponse;
