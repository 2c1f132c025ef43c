//! Protocol header rendering.

use std::fmt::Write;

use cangen_core::ir::{Message, Spec};

use crate::naming::Naming;

/// Renders the `<name>_protocol.h` header for a Spec.
pub fn render_header(spec: &Spec, naming: &Naming) -> String {
    let mut out = String::new();
    let guard = naming.include_guard();

    let _ = write!(
        out,
        "/*\n\
         \x20* Protocol codec for '{}' (source {}).\n\
         \x20* Generated by cangen. Do not edit by hand.\n\
         \x20*/\n\
         #ifndef {guard}\n\
         #define {guard}\n\
         \n\
         #include <stddef.h>\n\
         #include <stdint.h>\n\
         \n\
         #ifdef __cplusplus\n\
         extern \"C\" {{\n\
         #endif\n\
         \n\
         /* Result codes shared by all encode/decode functions. */\n\
         #define CG_OK (0)\n\
         #define CG_ERR_NULL (-1)\n\
         #define CG_ERR_SIZE (-2)\n\
         #define CG_ERR_RANGE (-3)\n",
        spec.meta.name, spec.meta.source,
    );

    for message in &spec.messages {
        render_message(&mut out, message, naming);
    }

    let _ = write!(
        out,
        "\n\
         #ifdef __cplusplus\n\
         }}\n\
         #endif\n\
         \n\
         #endif /* {guard} */\n",
    );

    out
}

fn render_message(out: &mut String, message: &Message, naming: &Naming) {
    let struct_name = naming.struct_name(message);

    let _ = write!(
        out,
        "\n\
         #define {} (0x{:x}u)\n\
         #define {} ({}u)\n\
         \n\
         /* Raw signal values of '{}'; no scaling is applied. */\n\
         typedef struct {{\n",
        naming.id_macro(message),
        message.id,
        naming.dlc_macro(message),
        message.dlc,
        message.name,
    );

    if message.signals.is_empty() {
        out.push_str("    uint8_t reserved;\n");
    }
    for signal in &message.signals {
        let c_type = if signal.signed { "int64_t" } else { "uint64_t" };
        let _ = writeln!(out, "    {c_type} {};", naming.field(&signal.name));
    }

    let _ = write!(
        out,
        "}} {struct_name};\n\
         \n\
         int {}(uint8_t *out, size_t out_size, const {struct_name} *in);\n\
         int {}(const uint8_t *in, size_t in_size, {struct_name} *out);\n",
        naming.encode_fn(message),
        naming.decode_fn(message),
    );
}
