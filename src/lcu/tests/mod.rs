// Tests for the LCU transport layer



mod test_debounce;
