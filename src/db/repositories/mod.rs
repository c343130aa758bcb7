pub mod analysis_logs;
