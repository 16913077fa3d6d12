fn main() {
    // Generate the label map protobuf types
    protobuf_codegen::Codegen::new()
        .pure()
        .includes(["src/protos"])
        .input("src/protos/string_int_label_map.proto")
        .cargo_out_dir("label-map-protos")
        .run_from_script();
}
