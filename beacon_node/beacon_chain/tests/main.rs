mod payload_executor;
