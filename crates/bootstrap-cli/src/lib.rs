// z80-bootstrap: command-line front end.
//
//   main → Settings::load → default_plan → StepsRunner::run → report → exit code

pub mod command_settings;
pub mod report;
