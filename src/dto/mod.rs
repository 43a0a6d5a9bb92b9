pub mod drip_dto;
