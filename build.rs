fn main() {
    println!("cargo:rerun-if-env-changed=ROSECOMPASS_CONFIG");

    // Only the firmware build links against ESP-IDF; host tests skip this.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
