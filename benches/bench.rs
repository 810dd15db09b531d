use clplayer_core::demultiplex::{NullStreamTracker, TsParser};
use clplayer_core::dlna::{HeadResponse, HeadResponseInfo};
use clplayer_core::packet::Packet;
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

/// Wraps a section in a single packet, after a zero pointer_field.
fn section_packet(pid: u16, cc: u8, section: &[u8]) -> Vec<u8> {
    let mut pk = vec![Packet::SYNC_BYTE, 0x40 | (pid >> 8) as u8, pid as u8, 0x10 | cc];
    pk.push(0);
    pk.extend_from_slice(section);
    pk.resize(Packet::SIZE, 0xff);
    pk
}

/// PAT and PMT every 40 packets, the rest video and null packets.
fn synthetic_stream(packets: usize) -> Vec<u8> {
    let pat = [
        0x00, 0xb0, 0x0d, 0x00, 0x01, 0xc1, 0x00, 0x00, 0x00, 0x01, 0xe1, 0x00, 0, 0, 0, 0,
    ];
    let pmt = [
        0x02, 0xb0, 0x17, 0x00, 0x01, 0xc1, 0x00, 0x00, 0xe1, 0x01, 0xf0, 0x00, 0x1b, 0xe1,
        0x01, 0xf0, 0x00, 0xc0, 0xe1, 0xf0, 0xf0, 0x00, 0, 0, 0, 0,
    ];
    let mut data = Vec::with_capacity(packets * Packet::SIZE);
    for i in 0..packets {
        let cc = (i / 40 % 16) as u8;
        match i % 40 {
            0 => data.extend(section_packet(0, cc, &pat)),
            1 => data.extend(section_packet(0x100, cc, &pmt)),
            n if n % 2 == 0 => {
                let mut pk = vec![Packet::SYNC_BYTE, 0x01, 0x01, 0x10 | (i % 16) as u8];
                pk.resize(Packet::SIZE, 0xaa);
                data.extend(pk);
            }
            _ => {
                let mut pk = vec![Packet::SYNC_BYTE, 0x1f, 0xff, 0x10];
                pk.resize(Packet::SIZE, 0xff);
                data.extend(pk);
            }
        }
    }
    data
}

fn ts_parser(c: &mut Criterion) {
    let buf = synthetic_stream(100_000);
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(buf.len() as u64));
    group.bench_function("ts_parser", |b| {
        let mut parser = TsParser::new();
        let mut tracker = NullStreamTracker;
        b.iter(|| {
            parser.reset();
            parser.feed(&mut tracker, &buf[..]);
            parser.flush(&mut tracker);
        });
    });
    group.finish();
}

const RESPONSE: &str = "HTTP/1.1 200 OK\r\n\
    Content-Type: application/x-dtcp1;DTCP1HOST=192.168.0.5;DTCP1PORT=8999;CONTENTFORMAT=video/mpeg\r\n\
    contentFeatures.dlna.org: DLNA.ORG_PN=MPEG_TS_HD_NA_ISO;DLNA.ORG_OP=11;DLNA.ORG_PS=-8,-4,-2,-1/2,1/2,2,4,8;DLNA.ORG_FLAGS=01710000000000000000000000000000\r\n\
    TimeSeekRange.dlna.org: npt=0:00:00.000-0:55:35.100/0:55:35.100 bytes=0-5219255/5219256\r\n\
    availableSeekRange.dlna.org: 0 npt=0-3335.1 cleartextbytes=0-5219255\r\n\
    Accept-Ranges: bytes\r\n\
    Server: bench\r\n\r\n";

fn head_response(c: &mut Criterion) {
    c.bench_function("head_response", |b| {
        b.iter(|| {
            let response = HeadResponse::parse(RESPONSE).unwrap();
            HeadResponseInfo::from_response(&response)
        });
    });
}

criterion_group!(benches, ts_parser, head_response);
criterion_main!(benches);
