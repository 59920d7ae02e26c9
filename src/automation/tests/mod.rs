// Tests for the automation engine




mod test_orchestrator;
