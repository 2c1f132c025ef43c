//! Roundtrip harness rendering.
//!
//! The verifier does not link against the artifact; it emits a small C
//! program that embeds the sampled raw values, exercises the generated
//! encode/decode functions, and prints a line-oriented transcript that the
//! Rust side parses and judges. The harness never decides pass or fail
//! itself.
//!
//! Transcript format, one block per case:
//!
//! ```text
//! CASE <loop_index> <message_tag>
//! ENCODE <rc> <payload hex | ->
//! DECODE <rc> [<value hex> ...]
//! REENCODE <rc> <payload hex | ->
//! ```
//!
//! `DECODE` and `REENCODE` lines are omitted past the first nonzero return
//! code, mirroring the control flow of the program.

use std::fmt::Write;

use cangen_codegen::Naming;
use cangen_core::ir::{Message, Spec};

use super::LoopPlan;

/// Renders the complete harness translation unit for a planned campaign.
///
/// Deterministic: the output is a pure function of the Spec and the plans.
pub fn render_harness(spec: &Spec, naming: &Naming, plans: &[LoopPlan]) -> String {
    let mut out = String::new();

    let _ = write!(
        out,
        "/*\n\
         \x20* Roundtrip harness for '{}'. Generated by cangen. Do not edit by hand.\n\
         \x20*/\n\
         #include <stdio.h>\n\
         #include <string.h>\n\
         \n\
         #include \"{}\"\n",
        spec.meta.name,
        naming.header_file(),
    );

    if !spec.messages.is_empty() {
        out.push_str(
            "\nstatic void print_hex(const uint8_t *buf, size_t len)\n\
             {\n\
             \x20   size_t i;\n\
             \n\
             \x20   for (i = 0; i < len; i++) {\n\
             \x20       printf(\"%02x\", (unsigned)buf[i]);\n\
             \x20   }\n\
             \x20   printf(\"\\n\");\n\
             }\n",
        );
    }

    for message in &spec.messages {
        render_runner(&mut out, message, naming);
    }

    render_value_tables(&mut out, plans);
    render_main(&mut out, spec, naming, plans);

    out
}

fn render_runner(out: &mut String, message: &Message, naming: &Naming) {
    let tag = naming.message_tag(message);
    let struct_name = naming.struct_name(message);
    let dlc_macro = naming.dlc_macro(message);

    let _ = write!(
        out,
        "\n\
         static void run_{tag}(int loop_index, const uint64_t *values)\n\
         {{\n\
         \x20   {struct_name} in;\n\
         \x20   {struct_name} decoded;\n\
         \x20   uint8_t encoded[{dlc_macro}];\n\
         \x20   uint8_t reencoded[{dlc_macro}];\n\
         \x20   int rc;\n\
         \n",
    );

    if message.signals.is_empty() {
        out.push_str("    (void)values;\n");
    }
    out.push_str("    memset(&in, 0, sizeof(in));\n");
    for (i, signal) in message.signals.iter().enumerate() {
        let field = naming.field(&signal.name);
        if signal.signed {
            let _ = writeln!(out, "    in.{field} = (int64_t)values[{i}];");
        } else {
            let _ = writeln!(out, "    in.{field} = values[{i}];");
        }
    }

    let _ = write!(
        out,
        "\n\
         \x20   printf(\"CASE %d {tag}\\n\", loop_index);\n\
         \x20   rc = {}(encoded, sizeof(encoded), &in);\n\
         \x20   printf(\"ENCODE %d \", rc);\n\
         \x20   if (rc != CG_OK) {{\n\
         \x20       printf(\"-\\n\");\n\
         \x20       return;\n\
         \x20   }}\n\
         \x20   print_hex(encoded, sizeof(encoded));\n\
         \n\
         \x20   rc = {}(encoded, sizeof(encoded), &decoded);\n\
         \x20   printf(\"DECODE %d\", rc);\n\
         \x20   if (rc != CG_OK) {{\n\
         \x20       printf(\"\\n\");\n\
         \x20       return;\n\
         \x20   }}\n",
        naming.encode_fn(message),
        naming.decode_fn(message),
    );

    for signal in &message.signals {
        let field = naming.field(&signal.name);
        if signal.signed {
            let _ = writeln!(
                out,
                "    printf(\" %llx\", (unsigned long long)(uint64_t)decoded.{field});"
            );
        } else {
            let _ = writeln!(out, "    printf(\" %llx\", (unsigned long long)decoded.{field});");
        }
    }

    let _ = write!(
        out,
        "    printf(\"\\n\");\n\
         \n\
         \x20   rc = {}(reencoded, sizeof(reencoded), &decoded);\n\
         \x20   printf(\"REENCODE %d \", rc);\n\
         \x20   if (rc != CG_OK) {{\n\
         \x20       printf(\"-\\n\");\n\
         \x20       return;\n\
         \x20   }}\n\
         \x20   print_hex(reencoded, sizeof(reencoded));\n\
         }}\n",
        naming.encode_fn(message),
    );
}

fn render_value_tables(out: &mut String, plans: &[LoopPlan]) {
    for plan in plans {
        for (c, case) in plan.cases.iter().enumerate() {
            let _ = write!(out, "\nstatic const uint64_t values_{}_{c}[] = {{", plan.loop_index);
            if case.values.is_empty() {
                // A one-element placeholder keeps the array well-formed; the
                // runner never reads it.
                out.push_str(" 0ull ");
            } else {
                out.push('\n');
                for value in &case.values {
                    let _ = writeln!(out, "    {value:#x}ull,");
                }
            }
            out.push_str("};\n");
        }
    }
}

fn render_main(out: &mut String, spec: &Spec, naming: &Naming, plans: &[LoopPlan]) {
    out.push_str("\nint main(void)\n{\n");
    for plan in plans {
        for (c, case) in plan.cases.iter().enumerate() {
            let tag = naming.message_tag(&spec.messages[case.message_index]);
            let _ = writeln!(out, "    run_{tag}({}, values_{}_{c});", plan.loop_index, plan.loop_index);
        }
    }
    out.push_str("    return 0;\n}\n");
}
