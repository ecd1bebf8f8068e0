pub mod exam_dto;
pub mod session_dto;
