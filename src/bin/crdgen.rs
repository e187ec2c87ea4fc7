//! # CRD Generator
//!
//! Generates the `Organization` CustomResourceDefinition YAML from the Rust
//! type definition.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/organization.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use kube::core::CustomResourceExt;
use organization_controller::crd::Organization;

fn main() {
    let crd = Organization::crd();

    match serde_yaml::to_string(&crd) {
        Ok(yaml) => {
            // Print header comments warning that this file should not be edited manually
            println!("# This file is auto-generated by crdgen");
            println!("# DO NOT EDIT THIS FILE MANUALLY");
            println!("# Change the Organization type in src/crd/spec.rs instead");
            println!("#");
            println!("---");
            print!("{yaml}");
        }
        Err(e) => {
            eprintln!("Failed to serialize CRD to YAML: {e}");
            std::process::exit(1);
        }
    }
}
