pub(crate) mod intake_service;
