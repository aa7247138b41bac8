pub(crate) mod check_config;
pub(crate) mod list;
pub(crate) mod run;
