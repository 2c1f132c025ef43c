//! Protocol implementation rendering.
//!
//! Every signal is written and read through its byte runs: the contiguous
//! stretches of raw-value bits that land inside one payload byte. Each run
//! becomes one masked shift/OR statement, which keeps the emitted code flat
//! and identical across invocations.

use std::fmt::Write;

use cangen_core::codec::raw_range;
use cangen_core::ir::{Message, Signal, Spec};
use cangen_core::layout::{byte_runs, signal_positions};

use crate::error::CodegenError;
use crate::naming::Naming;

/// Renders the `<name>_protocol.c` implementation for a Spec.
pub fn render_source(spec: &Spec, naming: &Naming) -> Result<String, CodegenError> {
    let mut out = String::new();

    let _ = write!(
        out,
        "/*\n\
         \x20* Protocol codec for '{}' (source {}).\n\
         \x20* Generated by cangen. Do not edit by hand.\n\
         \x20*/\n\
         #include <string.h>\n\
         \n\
         #include \"{}\"\n",
        spec.meta.name,
        spec.meta.source,
        naming.header_file(),
    );

    for message in &spec.messages {
        render_encode(&mut out, message, naming)?;
        render_decode(&mut out, message, naming)?;
    }

    Ok(out)
}

/// Mask of `width` one-bits as a C literal, e.g. `0xffull`.
fn mask_literal(width: u32) -> String {
    format!("{:#x}ull", (1u128 << width) - 1)
}

fn check_run(message: &Message, byte: u32, width: u32) -> Result<(), CodegenError> {
    if byte >= message.dlc as u32 || width > 8 {
        return Err(CodegenError::Internal(format!(
            "byte run {byte}+{width} escapes the {}-byte payload of '{}'",
            message.dlc, message.name
        )));
    }
    Ok(())
}

fn render_encode(out: &mut String, message: &Message, naming: &Naming) -> Result<(), CodegenError> {
    let struct_name = naming.struct_name(message);
    let dlc_macro = naming.dlc_macro(message);

    let _ = write!(
        out,
        "\n\
         int {}(uint8_t *out, size_t out_size, const {struct_name} *in)\n\
         {{\n",
        naming.encode_fn(message),
    );
    if !message.signals.is_empty() {
        out.push_str("    uint64_t raw;\n\n");
    }
    let _ = write!(
        out,
        "    if ((out == NULL) || (in == NULL)) {{\n\
         \x20       return CG_ERR_NULL;\n\
         \x20   }}\n\
         \x20   if (out_size < {dlc_macro}) {{\n\
         \x20       return CG_ERR_SIZE;\n\
         \x20   }}\n",
    );

    for signal in &message.signals {
        render_range_check(out, signal, naming);
    }

    let _ = write!(out, "\n    memset(out, 0, {dlc_macro});\n");

    for signal in &message.signals {
        let field = naming.field(&signal.name);
        if signal.signed {
            let _ = write!(out, "\n    raw = (uint64_t)in->{field};\n");
        } else {
            let _ = write!(out, "\n    raw = in->{field};\n");
        }
        for run in byte_runs(&signal_positions(signal)) {
            check_run(message, run.byte, run.width)?;
            let _ = writeln!(
                out,
                "    out[{}] |= (uint8_t)(((raw >> {}) & {}) << {});",
                run.byte,
                run.value_lsb,
                mask_literal(run.width),
                run.byte_lsb,
            );
        }
    }

    out.push_str("\n    return CG_OK;\n}\n");
    Ok(())
}

fn render_decode(out: &mut String, message: &Message, naming: &Naming) -> Result<(), CodegenError> {
    let struct_name = naming.struct_name(message);

    let _ = write!(
        out,
        "\n\
         int {}(const uint8_t *in, size_t in_size, {struct_name} *out)\n\
         {{\n",
        naming.decode_fn(message),
    );
    if !message.signals.is_empty() {
        out.push_str("    uint64_t raw;\n\n");
    }
    let _ = write!(
        out,
        "    if ((in == NULL) || (out == NULL)) {{\n\
         \x20       return CG_ERR_NULL;\n\
         \x20   }}\n\
         \x20   if (in_size < {}) {{\n\
         \x20       return CG_ERR_SIZE;\n\
         \x20   }}\n\
         \n\
         \x20   memset(out, 0, sizeof(*out));\n",
        naming.dlc_macro(message),
    );

    for signal in &message.signals {
        let field = naming.field(&signal.name);
        out.push_str("\n    raw = 0;\n");
        for run in byte_runs(&signal_positions(signal)) {
            check_run(message, run.byte, run.width)?;
            let _ = writeln!(
                out,
                "    raw |= (((uint64_t)in[{}] >> {}) & {}) << {};",
                run.byte,
                run.byte_lsb,
                mask_literal(run.width),
                run.value_lsb,
            );
        }
        if signal.signed {
            if signal.bit_length < 64 {
                let sign_bit = 1u64 << (signal.bit_length - 1);
                let fill = !((1u64 << signal.bit_length) - 1);
                let _ = write!(
                    out,
                    "    if ((raw & {sign_bit:#x}ull) != 0) {{\n\
                     \x20       raw |= {fill:#x}ull;\n\
                     \x20   }}\n",
                );
            }
            let _ = writeln!(out, "    out->{field} = (int64_t)raw;");
        } else {
            let _ = writeln!(out, "    out->{field} = raw;");
        }
    }

    out.push_str("\n    return CG_OK;\n}\n");
    Ok(())
}

/// Emits the raw-value range check of one signal, if its width needs one.
///
/// 64-bit signals span the whole storage type, so no check is emitted.
fn render_range_check(out: &mut String, signal: &Signal, naming: &Naming) {
    if signal.bit_length == 64 {
        return;
    }
    let field = naming.field(&signal.name);
    let (lo, hi) = raw_range(signal.bit_length, signal.signed);
    if signal.signed {
        let _ = write!(
            out,
            "    if ((in->{field} < {lo}ll) || (in->{field} > {hi}ll)) {{\n\
             \x20       return CG_ERR_RANGE;\n\
             \x20   }}\n",
        );
    } else {
        let _ = write!(
            out,
            "    if (in->{field} > {hi}ull) {{\n\
             \x20       return CG_ERR_RANGE;\n\
             \x20   }}\n",
        );
    }
}
