// Build script for section-service
// Compiles section.proto for the gRPC server (and a client for tests) and
// writes the descriptor set served by reflection
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=proto/section.proto");

    let protoc = protoc_bin_vendored::protoc_bin_path().expect("failed to find protoc");
    std::env::set_var("PROTOC", protoc);

    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .file_descriptor_set_path(out_dir.join("section_descriptor.bin"))
        .compile_protos(&["proto/section.proto"], &["proto"])
        .expect("Failed to compile section.proto for section-service");
}
