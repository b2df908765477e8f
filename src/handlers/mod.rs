// Two security tiers: public (no auth) and protected (gateway JWT).
pub mod forms;
pub mod protected;
pub mod public;
