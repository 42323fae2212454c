pub mod field_boundary_repo;
pub mod form_response_repo;

pub use field_boundary_repo::FieldBoundaryRepository;
pub use form_response_repo::FormResponseRepository;

/// 写入时缺省的 submission_date / creation_date
pub(crate) fn now_iso() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}
