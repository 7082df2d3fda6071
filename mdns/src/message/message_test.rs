use super::*;

#[test]
fn test_name_round_trip() -> Result<()> {
    let mut out = vec![];
    pack_name("a1b2c3.local", &mut out)?;
    assert_eq!(out[0], 6);
    assert_eq!(out[out.len() - 1], 0);

    let (name, off) = unpack_name(&out, 0)?;
    assert_eq!(name, "a1b2c3.local.");
    assert_eq!(off, out.len());
    Ok(())
}

#[test]
fn test_name_compression_pointer() -> Result<()> {
    // "x.local" at offset 0, then a pointer back to it at offset 9
    let mut buf = vec![];
    pack_name("x.local", &mut buf)?;
    let ptr_off = buf.len();
    buf.extend_from_slice(&[0xc0, 0x00]);

    let (name, off) = unpack_name(&buf, ptr_off)?;
    assert_eq!(name, "x.local.");
    assert_eq!(off, ptr_off + 2);
    Ok(())
}

#[test]
fn test_question_round_trip() -> Result<()> {
    let q = Question {
        name: "host.local.".to_owned(),
        typ: TYPE_A,
        class: CLASS_IN,
    };
    let mut out = vec![];
    q.pack(&mut out)?;
    let (got, off) = Question::unpack(&out, 0)?;
    assert_eq!(got, q);
    assert_eq!(off, out.len());
    Ok(())
}

#[test]
fn test_a_resource_round_trip() -> Result<()> {
    let a = AResource {
        name: "host.local.".to_owned(),
        ttl: 120,
        addr: "192.168.1.7".parse().unwrap(),
    };
    let mut out = vec![];
    a.pack(&mut out)?;
    let (got, off) = AResource::unpack(&out, 0)?;
    let got = got.expect("A record expected");
    assert_eq!(got.addr, a.addr);
    assert_eq!(got.name, a.name);
    assert_eq!(off, out.len());
    Ok(())
}

#[test]
fn test_header_round_trip() -> Result<()> {
    let h = Header {
        id: 0,
        response: true,
        authoritative: true,
        questions: 0,
        answers: 1,
    };
    let mut out = vec![];
    h.pack(&mut out);
    assert_eq!(out.len(), HEADER_SIZE);
    let got = Header::unpack(&out)?;
    assert_eq!(got, h);
    Ok(())
}
