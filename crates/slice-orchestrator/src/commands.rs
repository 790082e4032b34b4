//! Shell command templates run on slice hosts.
//!
//! Slot services are started through upstart (`/sbin/start`) when present,
//! systemd otherwise.

use slice_core::Slot;
use slice_core::config::BASE_DIR;
use slice_placement::Assignment;

pub const KIKIMR_BIN_PATH: &str = "/Berkanavt/kikimr/bin/kikimr";
pub const KIKIMR_CFG_PATH: &str = "/Berkanavt/kikimr/cfg";
pub const KIKIMR_SECRETS_PATH: &str = "/Berkanavt/kikimr/token";

/// Shared libraries shipped next to the binary when present.
pub const BUNDLED_LIBS: [&str; 3] = ["libiconv.so", "liblibaio-dynamic.so", "liblibidn-dynamic.so"];

pub fn ensure_base_dir() -> String {
    format!("sudo mkdir -p {BASE_DIR}")
}

/// Zero the first megabyte of every kikimr-labelled partition.
pub fn format_drives() -> String {
    r"sudo find /dev/disk/ -path '*/by-partlabel/kikimr_*' -exec dd if=/dev/zero of={} bs=1M count=1 status=none \;"
        .to_string()
}

pub fn clear_registered_slots() -> String {
    format!(r"sudo find {BASE_DIR}/ -maxdepth 1 -type d  -name 'kikimr_*' -exec  rm -rf -- {{}} \;")
}

pub fn clear_slot(slot: &Slot) -> String {
    format!(
        r"sudo find {BASE_DIR}/ -maxdepth 1 -type d  -name kikimr_{} -exec  rm -rf -- {{}} \;",
        slot.name
    )
}

pub fn clear_logs() -> String {
    format!(
        "sudo service rsyslog stop; \
         find {BASE_DIR}/ -mindepth 2 -maxdepth 2 -name logs | egrep '^{BASE_DIR}/kikimr' | sudo xargs -I% find % -mindepth 1 -delete; \
         sudo service rsyslog start;"
    )
}

/// Write the slot's registration file for the tenant it was placed for.
pub fn deploy_slot_config(assignment: &Assignment) -> String {
    let slot = &assignment.slot;
    let slot_dir = slot.directory();
    let logs_dir = format!("{slot_dir}/logs");
    let env_txt = format!("{slot_dir}/env.txt");
    let slot_cfg = format!("{slot_dir}/slot_cfg");
    // Literal `\n` sequences, expanded by `echo -e` on the host.
    let cfg = format!(
        r"tenant={}\ngrpc={}\nmbus={}\nic={}\nmon={}",
        assignment.tenant_path(),
        slot.grpc,
        slot.mbus,
        slot.ic,
        slot.mon,
    );

    format!(
        "sudo sh -c 'mkdir -p {logs_dir}; sudo chown syslog {logs_dir}; touch {env_txt}; /bin/echo -e \"{cfg}\" > {slot_cfg};'"
    )
}

/// Start a placed slot for its tenant, pinned to a NUMA node if assigned.
pub fn start_slot_for_tenant(assignment: &Assignment) -> String {
    let slot = &assignment.slot;
    let bind = assignment
        .numa_node
        .map(|node| format!(" bindnumanode={node}"))
        .unwrap_or_default();
    format!(
        "sudo sh -c \"if [ -x /sbin/start ]; \
         then start kikimr-multi slot={} tenant={} mbus={} grpc={} mon={} ic={}{bind}; \
         else systemctl start kikimr-multi@{}; fi\"",
        slot.name,
        assignment.tenant_path(),
        slot.mbus,
        slot.grpc,
        slot.mon,
        slot.ic,
        slot.name,
    )
}

pub fn stop_slot(slot: &Slot) -> String {
    format!(
        "sudo sh -c \"if [ -x /sbin/stop ]; \
         then stop kikimr-multi slot={name}; \
         else systemctl stop kikimr-multi@{name}; fi\"",
        name = slot.name
    )
}

/// Stop every slot registered on the host, whatever the cluster file says.
pub fn stop_all_slots() -> String {
    format!(
        "find {BASE_DIR}/ -maxdepth 1 -type d  -name kikimr_*  | while read x; do \
         sudo sh -c \"if [ -x /sbin/stop ]; \
         then stop kikimr-multi slot=${{x#{BASE_DIR}/kikimr_}}; \
         else systemctl stop kikimr-multi@${{x#{BASE_DIR}/kikimr_}}; fi\"; done"
    )
}

pub fn start_static() -> String {
    "sudo service kikimr start".to_string()
}

pub fn stop_static() -> String {
    "sudo service kikimr stop".to_string()
}

pub fn numa_node_count() -> String {
    "numactl --hardware | head -n 1 | awk '{print $2}'".to_string()
}

pub fn installed_binary_digest() -> String {
    format!("sha256sum {KIKIMR_BIN_PATH} | awk '{{print $1}}'")
}

pub fn fetch_auth_token(secret_version: &str) -> String {
    format!(
        "sudo bash -c 'set -o pipefail && sudo mkdir -p {KIKIMR_SECRETS_PATH} && \
         yav get version {secret_version} -o auth_file | sudo tee {KIKIMR_SECRETS_PATH}/kikimr.token'"
    )
}

/// Hard-link the auth token into the config directory as `auth.txt`.
pub fn link_auth_token() -> String {
    format!("sudo ln -f {KIKIMR_SECRETS_PATH}/kikimr.token {KIKIMR_CFG_PATH}/auth.txt")
}

pub fn fetch_tvm_secret(secret_version: &str) -> String {
    format!(
        "sudo bash -c 'set -o pipefail && yav get version {secret_version} -o tvm_secret |  sudo tee {KIKIMR_SECRETS_PATH}/tvm_secret'"
    )
}
