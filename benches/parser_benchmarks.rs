use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kaipo_counters::collectors::platform::linux::parse_proc_net_dev;
use kaipo_counters::collectors::platform::macos::{IFINFO2_MIN_LEN, RTM_IFINFO2, walk_interface_records};
use kaipo_counters::collectors::platform::windows::{
    IF_TYPE_ETHERNET_CSMACD, IfTableRow, MIB_IF_OPER_STATUS_OPERATIONAL, samples_from_rows,
};

/// Builds a /proc/net/dev table with `n` interfaces plus loopback
fn proc_net_dev_table(n: usize) -> String {
    let mut table = String::from(
        "Inter-|   Receive                                                |  Transmit\n \
         face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n    \
         lo: 2776770   11307    0    0    0     0          0         0  2776770   11307    0    0    0     0       0          0\n",
    );
    for i in 0..n {
        table.push_str(&format!(
            "  veth{:04}: {} 1234 0 0 0 0 0 0 {} 4321 0 0 0 0 0 0\n",
            i,
            i * 1_000_003,
            i * 997
        ));
    }
    table
}

/// Builds a NET_RT_IFLIST2-style buffer with `n` interface messages, each
/// followed by an address message that must be skipped
fn routing_buffer(n: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    for i in 0..n {
        let len = IFINFO2_MIN_LEN + 8;
        let start = buf.len();
        buf.resize(start + len, 0);
        buf[start..start + 2].copy_from_slice(&(len as u16).to_ne_bytes());
        buf[start + 3] = RTM_IFINFO2;
        buf[start + 12..start + 14].copy_from_slice(&(i as u16 + 2).to_ne_bytes());
        buf[start + 32] = 0x06;

        let addr_len = 20usize;
        let start = buf.len();
        buf.resize(start + addr_len, 0);
        buf[start..start + 2].copy_from_slice(&(addr_len as u16).to_ne_bytes());
        buf[start + 3] = 0x0c;
    }
    buf
}

fn interface_rows(n: usize) -> Vec<IfTableRow> {
    (0..n)
        .map(|i| {
            let mut phys_addr = [0u8; 8];
            // Every adapter appears three times, as on Vista and later
            phys_addr[4..6].copy_from_slice(&((i / 3) as u16).to_be_bytes());
            IfTableRow {
                if_type: IF_TYPE_ETHERNET_CSMACD,
                oper_status: MIB_IF_OPER_STATUS_OPERATIONAL,
                phys_addr,
                in_octets: i as u64,
                out_octets: i as u64,
            }
        })
        .collect()
}

fn benchmark_parsers(c: &mut Criterion) {
    let mut group = c.benchmark_group("interface_parsers");

    let table = proc_net_dev_table(64);
    group.bench_function("proc_net_dev_64_interfaces", |b| {
        b.iter(|| {
            let samples = parse_proc_net_dev(black_box(table.as_bytes())).expect("parse should work");
            black_box(samples);
        });
    });

    let buffer = routing_buffer(64);
    group.bench_function("iflist2_walk_64_interfaces", |b| {
        b.iter(|| {
            let samples = walk_interface_records(black_box(&buffer), |index| Some(format!("en{}", index)))
                .expect("walk should work");
            black_box(samples);
        });
    });

    let rows = interface_rows(96);
    group.bench_function("iftable_dedup_96_rows", |b| {
        b.iter(|| {
            let samples = samples_from_rows(black_box(rows.clone()));
            black_box(samples);
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_parsers);
criterion_main!(benches);
