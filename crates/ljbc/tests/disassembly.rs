use ljbc::{
    decode, disassemble, encode, opcode, Container, ContainerFlags, DecodeError, DisasmOptions,
    Disassembler, Instruction, Prototype, ResolveFault,
};

fn minimal(flags: u32) -> Container {
    let ret0 = Instruction::new(opcode::find("RET0").unwrap())
        .with_a(0)
        .with_d(1);
    Container::new(
        2,
        ContainerFlags(flags),
        Prototype {
            param_count: 0,
            frame_size: 2,
            instructions: vec![ret0],
            ..Prototype::default()
        },
    )
}

#[test]
fn test_ret0_line() {
    let container = decode(&encode(&minimal(ContainerFlags::STRIP))).unwrap();
    let text = disassemble(&container);
    // RET0's first operand is an rbase slot, which prints with `%%`; a plain
    // `%0` would claim a variable slot.
    let ret = text.lines().find(|l| l.contains("ret0")).unwrap();
    assert!(ret.ends_with("ret0   %%0, 1"), "{text}");
    assert!(!text.contains("ret0   %0, 1"), "{text}");
    assert!(text.contains("function(0 params, frame 2)"), "{text}");
}

#[test]
fn test_strip_flag_reported_as_encoded() {
    let stripped = disassemble(&decode(&encode(&minimal(ContainerFlags::STRIP))).unwrap());
    assert!(stripped.lines().any(|l| l == "; flags: StripDebugInfo"));

    let plain = disassemble(&decode(&encode(&minimal(0))).unwrap());
    assert!(!plain.contains("StripDebugInfo"));
    assert!(plain.lines().any(|l| l == "; flags: none"));
}

#[test]
fn test_unknown_flag_bits_print_raw() {
    let text = disassemble(&minimal(ContainerFlags::FFI | 0x40));
    let flags: Vec<&str> = text.lines().filter(|l| l.starts_with("; flags:")).collect();
    assert_eq!(flags, ["; flags: UsesFfi", "; flags: 0x40"]);
}

#[test]
fn test_unknown_opcode_uses_placeholder() {
    let bytes = [
        0x1b, 0x4c, 0x4a, 0x02, 0x00, // header
        0x0b, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // body header
        0xff, 0x12, 0x34, 0x56, // opcode 255
        0x00,
    ];
    let container = decode(&bytes).unwrap();
    assert_eq!(container.root.instructions[0], Instruction::new(255));
    assert!(disassemble(&container).contains("0000     unknwn\n"));
}

#[test]
fn test_empty_container_is_unresolved() {
    assert_eq!(
        decode(&[0x1b, 0x4c, 0x4a, 0x02, 0x00, 0x00]),
        Err(DecodeError::UnresolvedChild(ResolveFault::Unclaimed {
            count: 0
        }))
    );
}

#[test]
fn test_options_change_layout() {
    let container = minimal(0);
    let options = DisasmOptions {
        indent_width: 0,
        mark_jump_targets: false,
        show_header: false,
    };
    let text = Disassembler::with_options(options).disassemble(&container);
    assert!(!text.contains("; version"));
    assert!(text.lines().any(|l| l == "0000  ret0   %%0, 1"));
}
