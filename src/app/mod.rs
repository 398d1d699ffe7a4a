pub mod features_use_case;
pub mod ports;
pub mod prepare_use_case;
pub mod run_use_case;
