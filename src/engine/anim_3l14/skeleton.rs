use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use bitcode::{Decode, Encode};
use math_3l14::{SoaTransform, Transform};

/// Hard limit on the number of joints in a skeleton (and tracks in an animation)
pub const MAX_JOINTS: usize = 1024;
/// Hard limit on the number of SoA groups of 4 joints
pub const MAX_SOA_JOINTS: usize = MAX_JOINTS / 4;
/// Parent index of root joints
pub const NO_PARENT: i16 = -1;

#[inline] #[must_use]
pub const fn soa_count(count: usize) -> usize { count.div_ceil(4) }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointProperties
{
    pub parent: i16, // NO_PARENT for roots
    pub is_leaf: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkeletonError
{
    TooManyJoints(usize),
    ParentNotBeforeChild { joint: usize, parent: i16 },
    NonContiguousSiblings { joint: usize },
    MismatchedCounts { parents: usize, names: usize, bind_pose: usize },
    MalformedArchive,
}
impl Display for SkeletonError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(self, f) }
}
impl Error for SkeletonError { }

// Stored form of a skeleton, rebuilt (and so re-validated) through `Skeleton::new`
#[derive(Encode, Decode)]
struct SkeletonArchive
{
    parents: Box<[i16]>,
    names: Box<[String]>,
    bind_pose: Box<[Transform]>,
}

/// An immutable joint hierarchy.
///
/// Joints are stored so that parents always precede their children and
/// siblings (joints sharing a parent) are contiguous.
/// The hierarchy can then be walked with a single forward loop.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Skeleton
{
    joint_properties: Box<[JointProperties]>,
    joint_names: Box<[String]>,
    bind_pose: Box<[SoaTransform]>, // padding lanes are identity
}
impl Skeleton
{
    /// Build a skeleton from per-joint parents, names, and local bind pose transforms
    pub fn new(joint_parents: &[i16], joint_names: Box<[String]>, bind_pose: &[Transform]) -> Result<Self, SkeletonError>
    {
        let num_joints = joint_parents.len();
        if num_joints > MAX_JOINTS
        {
            return Err(SkeletonError::TooManyJoints(num_joints));
        }
        if joint_names.len() != num_joints || bind_pose.len() != num_joints
        {
            return Err(SkeletonError::MismatchedCounts { parents: num_joints, names: joint_names.len(), bind_pose: bind_pose.len() });
        }

        // slot 0 tracks roots, slot p + 1 tracks children of p
        let mut seen_parents = vec![false; num_joints + 1];
        let mut is_leaf = vec![true; num_joints];
        for (joint, &parent) in joint_parents.iter().enumerate()
        {
            if parent != NO_PARENT && (parent < 0 || parent as usize >= joint)
            {
                return Err(SkeletonError::ParentNotBeforeChild { joint, parent });
            }

            if joint == 0 || joint_parents[joint - 1] != parent
            {
                let slot = (parent + 1) as usize;
                if seen_parents[slot]
                {
                    return Err(SkeletonError::NonContiguousSiblings { joint });
                }
                seen_parents[slot] = true;
            }

            if parent != NO_PARENT
            {
                is_leaf[parent as usize] = false;
            }
        }

        let joint_properties = joint_parents.iter().zip(is_leaf)
            .map(|(&parent, is_leaf)| JointProperties { parent, is_leaf })
            .collect();

        let bind_pose = bind_pose.chunks(4).map(|chunk|
        {
            let mut soa = SoaTransform::IDENTITY;
            for (lane, transform) in chunk.iter().enumerate()
            {
                soa.set_lane(lane, *transform);
            }
            soa
        }).collect();

        Ok(Self
        {
            joint_properties,
            joint_names,
            bind_pose,
        })
    }

    #[inline] #[must_use] pub fn num_joints(&self) -> usize { self.joint_properties.len() }
    #[inline] #[must_use] pub fn num_soa_joints(&self) -> usize { soa_count(self.num_joints()) }

    #[inline] #[must_use] pub fn joint_properties(&self) -> &[JointProperties] { &self.joint_properties }
    #[inline] #[must_use] pub fn joint_names(&self) -> &[String] { &self.joint_names }
    /// Local-space bind pose, `num_soa_joints` long
    #[inline] #[must_use] pub fn bind_pose(&self) -> &[SoaTransform] { &self.bind_pose }

    #[inline] #[must_use]
    pub fn parent(&self, joint: usize) -> Option<usize>
    {
        debug_assert!(joint < self.num_joints(), "Joint {joint} out of range of {}", self.num_joints());
        match self.joint_properties[joint].parent
        {
            NO_PARENT => None,
            p => Some(p as usize),
        }
    }

    #[inline] #[must_use]
    pub fn is_leaf(&self, joint: usize) -> bool
    {
        debug_assert!(joint < self.num_joints(), "Joint {joint} out of range of {}", self.num_joints());
        self.joint_properties[joint].is_leaf
    }

    /// Index of the first joint with this name
    #[must_use]
    pub fn find_joint(&self, name: &str) -> Option<usize>
    {
        self.joint_names.iter().position(|n| n == name)
    }

    #[must_use]
    pub fn to_archive(&self) -> Vec<u8>
    {
        let archive = SkeletonArchive
        {
            parents: self.joint_properties.iter().map(|p| p.parent).collect(),
            names: self.joint_names.clone(),
            bind_pose: (0..self.num_joints()).map(|j| self.bind_pose[j / 4].lane(j % 4)).collect(),
        };
        bitcode::encode(&archive)
    }

    /// Decode a skeleton written by [`Self::to_archive`], with the same validation as [`Self::new`]
    pub fn from_archive(bytes: &[u8]) -> Result<Self, SkeletonError>
    {
        let archive: SkeletonArchive = bitcode::decode(bytes).map_err(|err|
        {
            log::debug!("Failed to decode skeleton archive: {err}");
            SkeletonError::MalformedArchive
        })?;
        Self::new(&archive.parents, archive.names, &archive.bind_pose)
    }
}
