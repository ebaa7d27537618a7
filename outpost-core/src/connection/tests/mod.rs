mod id_tests;
mod registry_tests;
