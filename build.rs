fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds (simulation, tests) need no ESP-IDF environment.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
