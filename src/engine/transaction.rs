// ==========================================
// 标高导入系统 - 事务作用域
// ==========================================
// 两阶段提交: 所有修改在事务组内暂存，最后一次 assimilate 或整体回滚
// 作用域在未显式提交时 Drop 即回滚，任何 ? 提前返回都会走回滚路径
// ==========================================

use crate::repository::error::DocumentResult;
use crate::repository::level_document_repo::LevelDocument;
use tracing::{error, warn};

// ==========================================
// GroupScope - 外层事务组
// ==========================================
pub struct GroupScope<'d, D: LevelDocument + ?Sized> {
    doc: &'d mut D,
    finished: bool,
}

impl<'d, D: LevelDocument + ?Sized> GroupScope<'d, D> {
    pub fn begin(doc: &'d mut D, name: &str) -> DocumentResult<Self> {
        doc.begin_group(name)?;
        Ok(Self {
            doc,
            finished: false,
        })
    }

    pub fn doc(&mut self) -> &mut D {
        self.doc
    }

    /// 合并事务组；失败时由 Drop 回滚
    pub fn assimilate(mut self) -> DocumentResult<()> {
        self.doc.assimilate_group()?;
        self.finished = true;
        Ok(())
    }
}

impl<D: LevelDocument + ?Sized> Drop for GroupScope<'_, D> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("事务组未合并，执行整体回滚");
        if let Err(e) = self.doc.rollback_group() {
            error!(error = %e, "事务组回滚失败");
        }
    }
}

// ==========================================
// TransactionScope - 内层事务
// ==========================================
pub struct TransactionScope<'d, D: LevelDocument + ?Sized> {
    doc: &'d mut D,
    finished: bool,
}

impl<'d, D: LevelDocument + ?Sized> TransactionScope<'d, D> {
    pub fn begin(doc: &'d mut D, name: &str) -> DocumentResult<Self> {
        doc.begin_transaction(name)?;
        Ok(Self {
            doc,
            finished: false,
        })
    }

    pub fn doc(&mut self) -> &mut D {
        self.doc
    }

    pub fn commit(mut self) -> DocumentResult<()> {
        self.doc.commit_transaction()?;
        self.finished = true;
        Ok(())
    }
}

impl<D: LevelDocument + ?Sized> Drop for TransactionScope<'_, D> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.doc.rollback_transaction() {
            error!(error = %e, "事务回滚失败");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory_document::MemoryLevelDocument;
    use crate::repository::DocumentError;

    #[test]
    fn test_dropped_scopes_roll_back() {
        let mut doc = MemoryLevelDocument::with_levels([("P1", 0.0)]);
        {
            let mut group = GroupScope::begin(&mut doc, "g").unwrap();
            let mut tx = TransactionScope::begin(group.doc(), "t").unwrap();
            tx.doc().create_level(10.0).unwrap();
        }
        assert_eq!(doc.level_records().len(), 1);
        assert_eq!(
            doc.events(),
            &["begin_group:g", "begin_transaction:t", "rollback_transaction", "rollback_group"]
        );
    }

    #[test]
    fn test_committed_scopes_persist() {
        let mut doc = MemoryLevelDocument::new();
        {
            let mut group = GroupScope::begin(&mut doc, "g").unwrap();
            let mut tx = TransactionScope::begin(group.doc(), "t").unwrap();
            tx.doc().create_level(10.0).unwrap();
            tx.commit().unwrap();
            group.assimilate().unwrap();
        }
        assert_eq!(doc.level_records().len(), 1);
        assert!(!doc.in_group());
    }

    #[test]
    fn test_failed_assimilate_rolls_back() {
        let mut doc = MemoryLevelDocument::new();
        doc.faults_mut().fatal_on_assimilate = true;
        let result = {
            let mut group = GroupScope::begin(&mut doc, "g").unwrap();
            let mut tx = TransactionScope::begin(group.doc(), "t").unwrap();
            tx.doc().create_level(10.0).unwrap();
            tx.commit().unwrap();
            group.assimilate()
        };
        assert!(matches!(result, Err(DocumentError::Fatal(_))));
        assert!(doc.level_records().is_empty());
        assert_eq!(doc.events().last().map(String::as_str), Some("rollback_group"));
    }
}
