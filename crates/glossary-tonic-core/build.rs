/// Builds the gRPC client and server code for the `glossary.proto` definition
/// using `tonic-prost-build`.
///
/// This code generation step processes the Protocol Buffer definitions located
/// in the `proto` directory and emits Rust modules with gRPC bindings into the
/// crate's `OUT_DIR`.
///
/// # Reflection
///
/// The encoded `FileDescriptorSet` is written next to the generated code as
/// `glossary_descriptor.bin`. The server registers it with the reflection
/// service so tools such as `grpcurl` can discover `glossary.GlossaryService`
/// without a local copy of the proto file.
///
/// # Panics
///
/// This function will `panic!` if code generation fails.
///
/// # Output
///
/// Generated code will be accessible in Rust via:
///
/// ```rust
/// pub mod proto {
///     tonic::include_proto!("glossary");
/// }
/// ```
use std::env;
use std::path::PathBuf;
fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("glossary_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    println!("cargo:rerun-if-changed=proto/glossary.proto");

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/glossary.proto"], &["proto"])
        .unwrap();
}
