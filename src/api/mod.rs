pub mod simulation_dto;
pub mod topology_dto;
