pub mod candidature_dto;
pub mod email_dto;
pub mod template_dto;
