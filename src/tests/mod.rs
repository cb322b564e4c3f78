//! Cross-module scenarios run against the binary's CLI and the library.

mod scenario_tests;
