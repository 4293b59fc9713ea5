use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::metrics::v2;
use super::stats::{
    CpuStat, Current, IoStat, KeyValueStat, Limit, MemoryEvents, MemoryStat, SingleLineStat,
};
use super::utils;

#[derive(Debug)]
struct HugeTlbFiles {
    pagesize: String,
    current: BufReader<File>,
    max: Option<BufReader<File>>,
}

/// Reads the controller files of one cgroup into a [`v2::Metrics`] payload.
///
/// File handles are kept open between reads and rewound after each read.
#[derive(Debug)]
pub struct StatReader {
    pids_current: Option<BufReader<File>>,
    pids_max: Option<BufReader<File>>,
    cpu_stat: Option<BufReader<File>>,
    memory_stat: Option<BufReader<File>>,
    memory_current: Option<BufReader<File>>,
    memory_max: Option<BufReader<File>>,
    memory_swap_current: Option<BufReader<File>>,
    memory_swap_max: Option<BufReader<File>>,
    memory_events: Option<BufReader<File>>,
    io_stat: Option<BufReader<File>>,
    hugetlb: Vec<HugeTlbFiles>,
}

impl StatReader {
    /// Reads the current counters.
    ///
    /// Controllers whose files were not available when the reader was built
    /// are left out of the payload.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading or parsing any opened file fails, e.g.
    /// because the cgroup was removed in the meantime.
    pub fn read(&mut self) -> std::io::Result<v2::Metrics> {
        let pids_current =
            utils::read_and_rewind(self.pids_current.as_mut(), Current::from_reader)?;
        let pids_max = utils::read_and_rewind(self.pids_max.as_mut(), Limit::from_reader)?;
        let pids = pids_current.map(|current| v2::PidsStat {
            current: current.0,
            limit: pids_max.map(Limit::or_max).unwrap_or_default(),
        });

        let cpu = utils::read_and_rewind(self.cpu_stat.as_mut(), CpuStat::from_reader)?
            .map(Into::into);

        let memory_stat =
            utils::read_and_rewind(self.memory_stat.as_mut(), MemoryStat::from_reader)?;
        let memory_current =
            utils::read_and_rewind(self.memory_current.as_mut(), Current::from_reader)?;
        let memory = match (memory_stat, memory_current) {
            (None, None) => None,
            (stat, current) => {
                let memory_max =
                    utils::read_and_rewind(self.memory_max.as_mut(), Limit::from_reader)?;
                let swap_current =
                    utils::read_and_rewind(self.memory_swap_current.as_mut(), Current::from_reader)?;
                let swap_max =
                    utils::read_and_rewind(self.memory_swap_max.as_mut(), Limit::from_reader)?;
                Some(stat.unwrap_or_default().into_payload(
                    current.unwrap_or_default().0,
                    memory_max.map(Limit::or_max).unwrap_or_default(),
                    swap_current.unwrap_or_default().0,
                    swap_max.map(Limit::or_max).unwrap_or_default(),
                ))
            }
        };

        let memory_events =
            utils::read_and_rewind(self.memory_events.as_mut(), MemoryEvents::from_reader)?
                .map(Into::into);

        let io = utils::read_and_rewind(self.io_stat.as_mut(), IoStat::from_reader)?.map(Into::into);

        let mut hugetlb = Vec::with_capacity(self.hugetlb.len());
        for files in &mut self.hugetlb {
            let current = utils::read_and_rewind(Some(&mut files.current), Current::from_reader)?
                .unwrap_or_default();
            let max = utils::read_and_rewind(files.max.as_mut(), Limit::from_reader)?;
            hugetlb.push(v2::HugeTlbStat {
                current: current.0,
                max: max.map(Limit::or_max).unwrap_or_default(),
                pagesize: files.pagesize.clone(),
            });
        }

        Ok(v2::Metrics {
            pids,
            cpu,
            memory,
            io,
            hugetlb,
            memory_events,
        })
    }
}

/// Builds a [`StatReader`] from individual controller files.
///
/// Files that cannot be opened are skipped and the corresponding controller
/// is reported as absent.
#[derive(Debug, Default)]
pub struct StatReaderBuilder {
    pids_current: Option<BufReader<File>>,
    pids_max: Option<BufReader<File>>,
    cpu_stat: Option<BufReader<File>>,
    memory_stat: Option<BufReader<File>>,
    memory_current: Option<BufReader<File>>,
    memory_max: Option<BufReader<File>>,
    memory_swap_current: Option<BufReader<File>>,
    memory_swap_max: Option<BufReader<File>>,
    memory_events: Option<BufReader<File>>,
    io_stat: Option<BufReader<File>>,
    hugetlb: Vec<HugeTlbFiles>,
}

impl StatReaderBuilder {
    /// Opens every known controller file below the cgroup directory `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` cannot be listed, e.g. because it does not exist.
    pub fn for_cgroup(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let mut builder = Self::default();
        builder
            .set_pids_files(path.join("pids.current"), path.join("pids.max"))
            .set_cpu_stat_file(path.join("cpu.stat"))
            .set_memory_stat_file(path.join("memory.stat"))
            .set_memory_usage_files(path.join("memory.current"), path.join("memory.max"))
            .set_memory_swap_files(path.join("memory.swap.current"), path.join("memory.swap.max"))
            .set_memory_events_file(path.join("memory.events"))
            .set_io_stat_file(path.join("io.stat"));

        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(pagesize) = file_name
                .to_str()
                .and_then(|name| name.strip_prefix("hugetlb."))
                .and_then(|name| name.strip_suffix(".current"))
            else {
                continue;
            };
            builder.add_hugetlb_files(
                pagesize,
                entry.path(),
                path.join(format!("hugetlb.{pagesize}.max")),
            );
        }
        builder.hugetlb.sort_by(|a, b| a.pagesize.cmp(&b.pagesize));

        Ok(builder)
    }

    /// Sets the `pids.current` and `pids.max` files.
    pub fn set_pids_files(
        &mut self,
        current: impl AsRef<Path>,
        max: impl AsRef<Path>,
    ) -> &mut Self {
        self.pids_current = utils::open_file(current);
        self.pids_max = utils::open_file(max);
        self
    }

    /// Sets the `cpu.stat` file.
    pub fn set_cpu_stat_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.cpu_stat = utils::open_file(path);
        self
    }

    /// Sets the `memory.stat` file.
    pub fn set_memory_stat_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.memory_stat = utils::open_file(path);
        self
    }

    /// Sets the `memory.current` and `memory.max` files.
    pub fn set_memory_usage_files(
        &mut self,
        current: impl AsRef<Path>,
        max: impl AsRef<Path>,
    ) -> &mut Self {
        self.memory_current = utils::open_file(current);
        self.memory_max = utils::open_file(max);
        self
    }

    /// Sets the `memory.swap.current` and `memory.swap.max` files.
    pub fn set_memory_swap_files(
        &mut self,
        current: impl AsRef<Path>,
        max: impl AsRef<Path>,
    ) -> &mut Self {
        self.memory_swap_current = utils::open_file(current);
        self.memory_swap_max = utils::open_file(max);
        self
    }

    pub fn set_memory_events_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.memory_events = utils::open_file(path);
        self
    }

    pub fn set_io_stat_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.io_stat = utils::open_file(path);
        self
    }

    /// Adds the `hugetlb.<pagesize>.current` and `.max` files of one page size.
    pub fn add_hugetlb_files(
        &mut self,
        pagesize: &str,
        current: impl AsRef<Path>,
        max: impl AsRef<Path>,
    ) -> &mut Self {
        if let Some(current) = utils::open_file(current) {
            self.hugetlb.push(HugeTlbFiles {
                pagesize: pagesize.to_owned(),
                current,
                max: utils::open_file(max),
            });
        }
        self
    }

    pub fn build(self) -> StatReader {
        StatReader {
            pids_current: self.pids_current,
            pids_max: self.pids_max,
            cpu_stat: self.cpu_stat,
            memory_stat: self.memory_stat,
            memory_current: self.memory_current,
            memory_max: self.memory_max,
            memory_swap_current: self.memory_swap_current,
            memory_swap_max: self.memory_swap_max,
            memory_events: self.memory_events,
            io_stat: self.io_stat,
            hugetlb: self.hugetlb,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_read_complete_cgroup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path();
        write(path, "pids.current", "5\n");
        write(path, "pids.max", "100\n");
        write(path, "cpu.stat", "usage_usec 1000000\nuser_usec 600000\nsystem_usec 400000\n");
        write(path, "memory.stat", "anon 1000\nfile 2000\npgfault 7\n");
        write(path, "memory.current", "4096\n");
        write(path, "memory.max", "max\n");
        write(path, "memory.swap.current", "0\n");
        write(path, "memory.swap.max", "8192\n");
        write(path, "memory.events", "low 0\nhigh 0\nmax 0\noom 1\noom_kill 1\n");
        write(path, "io.stat", "8:0 rbytes=10 wbytes=20 rios=1 wios=2\n");
        write(path, "hugetlb.2MB.current", "0\n");
        write(path, "hugetlb.2MB.max", "max\n");

        let mut reader = StatReaderBuilder::for_cgroup(path).unwrap().build();
        let stats = reader.read().unwrap();

        assert_eq!(
            stats.pids,
            Some(v2::PidsStat {
                current: 5,
                limit: 100
            })
        );
        assert_eq!(stats.cpu.as_ref().unwrap().usage_usec, 1_000_000);
        let memory = stats.memory.as_ref().unwrap();
        assert_eq!(memory.usage, 4096);
        assert_eq!(memory.usage_limit, u64::MAX);
        assert_eq!(memory.swap_limit, 8192);
        assert_eq!(memory.anon, 1000);
        assert_eq!(memory.pgfault, 7);
        assert_eq!(stats.memory_events.as_ref().unwrap().oom_kill, 1);
        assert_eq!(stats.io.as_ref().unwrap().usage[0].wbytes, 20);
        assert_eq!(stats.hugetlb.len(), 1);
        assert_eq!(stats.hugetlb[0].pagesize, "2MB");
        assert_eq!(stats.hugetlb[0].max, u64::MAX);

        // handles are rewound, so a second read sees the new content
        write(path, "pids.current", "6\n");
        let stats = reader.read().unwrap();
        assert_eq!(stats.pids.unwrap().current, 6);
    }

    #[test]
    fn test_missing_controllers_are_absent() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "pids.current", "1\n");

        let stats = StatReaderBuilder::for_cgroup(dir.path())
            .unwrap()
            .build()
            .read()
            .unwrap();

        assert_eq!(
            stats.pids,
            Some(v2::PidsStat {
                current: 1,
                limit: 0
            })
        );
        assert!(stats.cpu.is_none());
        assert!(stats.memory.is_none());
        assert!(stats.memory_events.is_none());
        assert!(stats.io.is_none());
        assert!(stats.hugetlb.is_empty());
    }

    #[test]
    fn test_invalid_file_fails_read() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "cpu.stat", "usage_usec abc\n");

        let err = StatReaderBuilder::for_cgroup(dir.path())
            .unwrap()
            .build()
            .read()
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_missing_cgroup_directory() {
        assert!(StatReaderBuilder::for_cgroup("/definitely/does/not/exist").is_err());
    }
}
