pub mod completions_cmd;
pub mod doctor;
pub mod onboard;
pub mod sessions_cmd;
pub mod status;
pub mod tools_cmd;
